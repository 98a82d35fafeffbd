pub(crate) use cluster::Cluster;
pub(crate) use completions::Completions;
pub(crate) use config::Config;
pub(crate) use init::Init;
pub(crate) use normalize::Normalize;
pub(crate) use relate::Relate;
pub(crate) use review::Review;
pub(crate) use summary::Summary;
pub(crate) use validity::Validity;
pub(crate) use years::Years;

mod cluster;
mod completions;
mod config;
mod init;
mod normalize;
mod relate;
mod review;
mod summary;
mod validity;
mod years;
