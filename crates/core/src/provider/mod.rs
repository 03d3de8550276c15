//! Concrete `Provider` implementations (§11, "A concrete HTTP-backed Provider").
//!
//! The core defines the `Provider`/`Model` contract (§4.3, §4.5) but does not mandate
//! any particular vendor API; [`http`] is one runnable example, not a model catalog —
//! additional providers are a registration, not a core change.

pub mod http;
