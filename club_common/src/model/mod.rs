mod cart;
mod event;
mod member;
mod order;
mod payment;
mod product;

pub use cart::{Cart, CartItem};
pub use event::Event;
pub use member::{Member, MemberStatus, MembershipType};
pub use order::{Order, OrderLine, OrderStatus};
pub use payment::{Payment, PaymentKind, PaymentMethod};
pub use product::Product;
