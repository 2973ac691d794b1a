/// Application layer: transition planning, provisioning and the use cases built on them
pub mod services;
pub mod use_cases;
