//! Feature selection for the per-grade models.
//!
//! The feature lists themselves are configuration data keyed by grade; the
//! correlation helpers only report on them.
pub mod correlation;
pub mod grade_features;

pub use correlation::{collinear_pairs, outcome_associations, CollinearPair, FeatureAssociation};
pub use grade_features::{
    remove_collinear_feature, select_feature_subset, CollinearExclusion, FeatureSelectionConfig,
    GradeFeatures,
};
