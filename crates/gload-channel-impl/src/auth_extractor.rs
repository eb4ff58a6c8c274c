use gload_channel_core::UpstreamHttpRequest;

pub fn set_bearer(req: &mut UpstreamHttpRequest, access_token: &str) {
    req.set_header("Authorization", format!("Bearer {access_token}"));
}

pub fn set_accept_json(req: &mut UpstreamHttpRequest) {
    req.set_header("Accept", "application/json");
}

pub fn set_content_type_json(req: &mut UpstreamHttpRequest) {
    req.set_header("Content-Type", "application/json");
}

pub fn set_header(req: &mut UpstreamHttpRequest, name: &str, value: &str) {
    req.set_header(name, value);
}
