use std::sync::Arc;

use crate::domain::search::VehicleSearch;

#[derive(Clone)]
pub struct AppState {
    pub app_url: String,
    vehicle_search: Arc<VehicleSearch>,
}

impl AppState {
    pub fn new(app_url: String, vehicle_search: VehicleSearch) -> Self {
        Self {
            app_url,
            vehicle_search: Arc::new(vehicle_search),
        }
    }

    pub fn vehicle_search(&self) -> Arc<VehicleSearch> {
        self.vehicle_search.clone()
    }
}
