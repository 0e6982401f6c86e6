pub mod cache;
pub mod pathfinder;
pub mod route;
pub mod router;

pub use cache::RouteCache;
pub use route::{Quote, Route, RouteHop, RouteKind};
pub use router::{Router, RouteResult};
