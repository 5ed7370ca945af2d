//! Domain layer: the payment entity, its validation rules, its state machine
//! and the ports the application layer persists through.

pub mod lifecycle;
pub mod payment;
pub mod ports;
pub mod validator;
