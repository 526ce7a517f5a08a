pub mod classify;
pub mod discovery;
pub mod enumerator;
pub mod fingerprint;
pub mod model;
pub mod network;
pub mod os;
pub mod scanner;
pub mod system;
pub mod vendors;
