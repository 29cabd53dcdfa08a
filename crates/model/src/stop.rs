use utility::id::HasId;

#[derive(Debug, Clone)]
pub struct Stop {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<utility::id::Id<Stop>>,
    pub location: Option<Location>,
    pub platform_code: Option<String>,
}

impl Stop {
    pub fn latitude(&self) -> Option<f64> {
        self.location.as_ref().map(|location| location.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.location.as_ref().map(|location| location.longitude)
    }

    pub fn address(&self) -> Option<String> {
        self.location
            .as_ref()
            .and_then(|location| location.address.clone())
    }
}

impl HasId for Stop {
    type IdType = String;
}

#[derive(Debug, Clone)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}
