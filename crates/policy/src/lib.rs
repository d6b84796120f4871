//! Weight policies and the providers that serve them.
//!
//! A policy is a named vector of per-annotation-kind integer weights in
//! `[1, 10]`. The scoring engine fetches its policy once at startup through a
//! [`PolicyProvider`], selected by the configuration's policy discriminator.

pub mod provider;
pub mod weights;

pub use provider::{
	LocalPolicyConfig, LocalPolicyProvider, OpaWeightsInfo, OpenPolicyConfig, OpenPolicyProvider,
	PolicyError, PolicyInfo, PolicyProvider, new_provider,
};
pub use weights::{Weight, WeightPolicy};
