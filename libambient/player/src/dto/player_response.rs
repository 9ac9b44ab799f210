#[derive(Clone, Debug)]
pub(crate) enum PlayerResponse {
    Destroyed,
}
