pub mod auth;
pub mod checkout;
pub mod events;
pub mod google;
pub mod invoice;
pub mod mailer;
pub mod order_workflow;
pub mod otp;
pub mod pdf;
pub mod razorpay;
pub mod sales_report;
pub mod wallet;
