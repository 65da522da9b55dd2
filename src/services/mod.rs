pub(crate) mod evaluation;
pub(crate) mod identity;
pub(crate) mod results_summary;
pub(crate) mod storage;
pub(crate) mod submissions;
