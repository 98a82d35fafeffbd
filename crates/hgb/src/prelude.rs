pub(crate) use crate::config::Config;
pub(crate) use crate::dossier::{Dossier, DossierId, DossierType};
pub(crate) use crate::error::{bail, HgbError, HgbResult};
pub(crate) use crate::progress::ProgressBarBuilder;
pub(crate) use crate::project::Project;
pub(crate) use crate::utils::init_logger;
