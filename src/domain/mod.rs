/// Domain layer: entities and value objects shared by every other layer
pub mod entities;
pub mod value_objects;
