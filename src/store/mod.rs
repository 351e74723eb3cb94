//! # Storage seam
//!
//! The engine never builds SQL itself. It hands a [`QueryPlan`] to a [`RecordStore`],
//! which translates the plan into whatever its backend understands and returns one
//! page of records plus the total number of matches.
//!
//! Each backend declares the predicate shapes it can translate through
//! [`Capabilities`]; the executor refuses to hand over a plan the store cannot honor.
//!
//! [`SqlStore`] is the Sea-ORM implementation and covers every capability.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::predicate::{Predicate, QueryPlan};

pub mod sql;

pub use sql::SqlStore;

/// Predicate shapes a backend can translate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub equality: bool,
    pub contains: bool,
    pub range: bool,
    pub or_group: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        equality: true,
        contains: true,
        range: true,
        or_group: true,
    };

    /// Whether every part of `predicate`, nested groups included, is supported.
    #[must_use]
    pub fn supports(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Equals { .. } => self.equality,
            Predicate::Contains { .. } => self.contains,
            Predicate::Between { .. } | Predicate::AtLeast { .. } | Predicate::AtMost { .. } => {
                self.range
            }
            Predicate::AnyOf(members) => {
                self.or_group && members.iter().all(|member| self.supports(member))
            }
        }
    }

    /// The first predicate of `plan` this backend cannot translate.
    #[must_use]
    pub fn first_unsupported<'p>(&self, plan: &'p QueryPlan) -> Option<&'p Predicate> {
        plan.predicates()
            .iter()
            .find(|predicate| !self.supports(predicate))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// A read-only, ordered, filterable record source.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Record: Send;

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Run `plan` and return the records of its page together with the number of
    /// records matching the predicates before paging.
    ///
    /// # Errors
    ///
    /// Returns the backend's `DbErr` unchanged.
    async fn paginate(&self, plan: &QueryPlan) -> Result<(Vec<Self::Record>, u64), DbErr>;
}
