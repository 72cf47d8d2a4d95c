mod activity;
mod campaign;
mod types;

pub use activity::ActivityService;
pub use campaign::CampaignService;
pub use types::{
    CampaignError, CreateCampaignRequest, CreateEmailActivityRequest, CreateFormActivityRequest,
};
