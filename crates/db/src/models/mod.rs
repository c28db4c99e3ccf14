pub mod dispatch_state;
pub mod published_post;
