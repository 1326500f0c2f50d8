/// Frame builders and a ready-made router for tests, shared by the unit tests and the
/// integration tests under `tests/`.
pub mod test;
