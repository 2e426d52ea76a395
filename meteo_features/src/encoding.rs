//! Location indicator columns
//!
//! Applied after every temporal shift, purely as a feature representation.

use crate::error::Result;
use crate::frame::{DropReason, FeatureFrame};
use crate::schema::FeatureSpec;

/// Append a 0/1 column per declared location indicator
pub fn encode_locations(frame: &mut FeatureFrame, specs: &[FeatureSpec]) -> Result<()> {
    for spec in specs {
        if let FeatureSpec::LocationIndicator { location } = spec {
            let values = frame
                .observations()
                .iter()
                .map(|o| Some(if &o.location == location { 1.0 } else { 0.0 }))
                .collect();
            frame.push_column(spec.column_name(), values, DropReason::MissingData)?;
        }
    }
    Ok(())
}
