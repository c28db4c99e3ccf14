pub mod dispatch_state_repo;
pub mod published_post_repo;

pub use dispatch_state_repo::DispatchStateRepo;
pub use published_post_repo::PublishedPostRepo;
