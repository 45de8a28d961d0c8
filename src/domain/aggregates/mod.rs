//! Aggregates module
pub mod account;
pub mod cart;
pub mod coupon;
pub mod offer;
pub mod order;
pub mod product;
pub mod wallet;

pub use account::{Address, OtpCode, OtpError, OtpPurpose, Profile, User};
pub use cart::{Cart, CartError, CartLine, QuantityChange};
pub use coupon::{Coupon, CouponError, CouponKind};
pub use offer::{CategoryOffer, OfferError, ProductOffer};
pub use order::{Order, OrderAggregate, OrderError, OrderItem, OrderItemStatus, PaymentMethod, PaymentStatus};
pub use product::{Category, Product, ProductError, ProductImage, ProductVariant};
pub use wallet::{Transaction, TransactionKind, TransactionStatus, Wallet, WalletError, WalletTransaction};
