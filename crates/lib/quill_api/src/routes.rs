//! Route paths served by the API.

pub const GET_API_HEALTH: &str = "/api/health";
pub const POST_API_CONTACT: &str = "/api/contact";
pub const POST_API_REPHRASE: &str = "/api/rephrase";
pub const POST_API_SUMMARIZE: &str = "/api/summarize";
pub const POST_API_SPELLCHECKER: &str = "/api/spellchecker";
pub const POST_API_GENERATE_BLOG: &str = "/api/generateBlog";
pub const POST_API_GENERATE_IMAGE: &str = "/api/generate-image";
pub const GET_API_CREDITS: &str = "/api/credits";
pub const PUT_API_ADMIN_CREDITS_OWNER: &str = "/api/admin/credits/{owner_id}";
