pub mod appliance;
pub mod record;
