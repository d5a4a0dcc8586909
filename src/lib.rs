//! # segroute
//!
//! A decision-tree path router: parses HTTP-style path patterns with
//! static, dynamic, and regex-classified segments, builds a sorted
//! decision tree from them, and resolves incoming paths against it
//! with typed parameter extraction.
//!
//! ## Example
//!
//! ```rust
//! use segroute::Router;
//!
//! let mut router: Router<&str> = Router::new('/');
//! router.add(
//!     "/users/<id:int>",
//!     "get_user",
//!     None,
//!     None,
//!     Default::default(),
//!     false,
//!     false,
//!     false,
//!     false,
//! ).unwrap();
//! router.finalize().unwrap();
//!
//! let resolved = router.resolve("/users/42", "GET").unwrap();
//! assert_eq!(resolved.handler, "get_user");
//! ```

pub mod error;
pub mod group;
pub mod matcher;
pub mod parser;
pub mod patterns;
pub mod route;
pub mod router;
pub mod tree;
pub mod value;

pub use error::RouterError;
pub use group::RouteGroup;
pub use patterns::{CastFn, InfoClass, ParamType, PatternRegistry};
pub use route::{ParamSlot, Route};
pub use router::{Resolved, Router};
pub use value::{Date, Value};
