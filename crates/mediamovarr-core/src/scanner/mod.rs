mod walk;

pub use walk::discover;
