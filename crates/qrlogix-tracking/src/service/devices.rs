//! Plate and device whitelists.

use super::CheckinService;
use crate::domain::{normalize_plate, TrackingError, TrackingResult};
use tracing::info;

impl CheckinService {
    /// Link a device to an authorized plate. Idempotent.
    ///
    /// Returns the normalized plate.
    pub async fn register_device(&self, device_id: &str, plate: &str) -> TrackingResult<String> {
        let plate =
            normalize_plate(plate).ok_or_else(|| TrackingError::InvalidPlate(plate.to_string()))?;

        if !self.repo.is_plate_authorized(&plate).await? {
            return Err(TrackingError::InvalidPlate(plate));
        }

        if !self.repo.is_device_authorized(device_id, &plate).await? {
            self.repo.authorize_device(device_id, &plate).await?;
            info!(plate = %plate, device_id = %device_id, "Device registered");
        }
        Ok(plate)
    }

    /// Add a plate to the whitelist. Returns false if it was already there.
    pub async fn authorize_plate(&self, plate: &str) -> TrackingResult<bool> {
        let plate =
            normalize_plate(plate).ok_or_else(|| TrackingError::InvalidPlate(plate.to_string()))?;
        let added = self.repo.authorize_plate(&plate).await?;
        if added {
            info!(plate = %plate, "Plate authorized");
        }
        Ok(added)
    }

    pub async fn is_device_registered(&self, device_id: &str, plate: &str) -> TrackingResult<bool> {
        match normalize_plate(plate) {
            Some(plate) => self.repo.is_device_authorized(device_id, &plate).await,
            None => Ok(false),
        }
    }
}
