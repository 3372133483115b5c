//! Persistence gateway and SQL repository adapters.
//!
//! The gateway (`Database` trait) is the only place that knows which engine
//! is running; repositories above it speak one canonical SQL flavour, and
//! the domain above them never sees SQL at all.

pub mod course_repository;
pub mod enrollment_repository;
pub mod gateway;
pub mod postgres;
mod rows;
pub mod schema;
pub mod sqlite;

pub use self::course_repository::SqlCourseRepository;
pub use self::enrollment_repository::SqlEnrollmentRepository;
pub use self::gateway::{Database, DatabaseError, Dialect, SqlRow, SqlValue};
pub use self::postgres::PostgresDatabase;
pub use self::schema::{initialize_schema, schema_statements};
pub use self::sqlite::SqliteDatabase;
