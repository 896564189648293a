use crate::detection::domain::Policy;

/// AdmissionControlSettings port - keeps the admission controller in step
/// with the sensor's policies
pub trait AdmissionControlSettings: Send + Sync {
    fn update_policies(&self, policies: &[Policy]);

    /// Drops any admission decisions cached from stale image data
    fn flush_cache(&self);
}
