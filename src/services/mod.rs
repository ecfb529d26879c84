pub(crate) mod access;
pub(crate) mod advisor;
pub(crate) mod grading;
pub(crate) mod recommendations;
pub(crate) mod storage;
