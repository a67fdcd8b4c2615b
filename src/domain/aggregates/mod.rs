//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{CatalogEntry, Product, ProductDetails, ProductError, ProductId, VendorId, DEFAULT_CATEGORY};
pub use order::{CustomerOrderSummary, Order, OrderError, OrderId, OrderItem, OrderLine, OrderStatus, Transition, VendorOrderSummary};
pub use cart::{Cart, CartError, CartLine, PricedLine, PricedOrder};
pub use user::{Identity, NewUser, NewVendor, Role, SignUp, User, UserError, UserId, Vendor, VendorListing, VerificationStatus};
