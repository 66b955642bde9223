//! Planning core for workshop events ("AKs").
//!
//! Provides the time-interval algebra, an incremental constraint violation
//! engine, timeslot discretization, and the JSON exchange with an external
//! schedule optimizer. CRUD screens, authentication and the optimizer itself
//! live elsewhere; they read and write planning data through a
//! [`PlanningStore`](repository::PlanningStore) and call into [`Planner`].
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Event`, `Activity`, `Slot`, `Room`,
//!   `Availability`, `ConstraintViolation`
//! - **`repository`**: Storage traits and the in-memory `LocalRepository`
//! - **`constraints`**: Violation rules and match/reconcile persistence
//! - **`timeslots`**: Fixed-width discretization into gap-free blocks
//! - **`solver`**: Solver input export and result import
//! - **`validation`**: Integrity checks (dangling references, prerequisite cycles)
//! - **`planner`**: Mutation service running rule cascades transactionally
//! - **`config`**: TOML-loadable tuning knobs
//!
//! # Example
//!
//! ```
//! use ak_planner::config::PlannerConfig;
//! use ak_planner::models::{Activity, AkId, Event, EventId, OwnerId, Slot, SlotId};
//! use ak_planner::planner::Mutation;
//! use ak_planner::repository::LocalRepository;
//! use ak_planner::Planner;
//! use chrono::{TimeZone, Utc};
//!
//! let at = |h, m| Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap();
//! let repo = LocalRepository::new(Event::new(EventId(1), "KoMa", at(9, 0), at(18, 0)));
//! let planner = Planner::new(repo, PlannerConfig::default()).unwrap();
//!
//! let stats = planner
//!     .apply(&[Mutation::SlotSaved(SlotId(2))], |store| {
//!         for (id, start) in [(1, at(10, 0)), (2, at(10, 30))] {
//!             store.save_activity(Activity::new(AkId(id), EventId(1), "AK").with_owner(OwnerId(1)))?;
//!             store.save_slot(Slot::new(SlotId(id), AkId(id), EventId(1), 1.0).at(start))?;
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//! assert_eq!(stats.inserted, 1);
//! ```
//!
//! # References
//!
//! - Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)
//! - Schaerf (1999), "A Survey of Automated Timetabling"

pub mod config;
pub mod constraints;
pub mod error;
pub mod models;
pub mod planner;
pub mod repository;
pub mod solver;
pub mod timeslots;
pub mod validation;

pub use error::{Error, Result};
pub use planner::Planner;
