//! # levy-db: Rule Store and Resolution Layer for Levy
//!
//! This crate owns every I/O concern of tax resolution: the SQLite Rule
//! Store, the active-class cache, the Activation Resolver and the
//! [`TaxService`] facade collaborators call.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Levy Data Flow                                   │
//! │                                                                         │
//! │  Checkout: compute_tax(order)        Admin API: create/update/delete   │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     levy-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  TaxService   │───►│   Resolver    │───►│    Cache     │  │   │
//! │  │   │ (service.rs)  │    │ (resolver.rs) │    │ memory/Redis │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   ┌─────────────────────────────────────┐   ┌──────────────┐  │   │
//! │  │   │ Repositories: TaxClass, Option,     │   │  Migrations  │  │   │
//! │  │   │ Geography (Database / pool.rs)      │   │  (embedded)  │  │   │
//! │  │   └─────────────────────────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)          levy-core::compose for the tax math             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - TaxService facade
//! - [`resolver`] - Activation Resolver (vendor scope, marketplace fallback)
//! - [`cache`] - Active-class cache trait and backends
//! - [`repository`] - Rule Store repositories
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Environment configuration
//! - [`retry`] - Single retry on transient failures
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use levy_db::{LevyConfig, TaxService};
//!
//! let service = TaxService::connect(&LevyConfig::load()?).await?;
//!
//! let breakdown = service.compute_tax(&order).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod resolver;
pub mod retry;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{InMemoryTaxClassCache, RedisTaxClassCache, TaxClassCache};
pub use config::{ConfigError, LevyConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use resolver::ActivationResolver;
pub use service::TaxService;

// Repository re-exports for convenience
pub use repository::geography::GeographyRepository;
pub use repository::tax_class::{SortDirection, SortField, TaxClassQuery, TaxClassRepository};
pub use repository::tax_option::TaxClassOptionRepository;
pub use repository::Page;
