use strum::Display;

/// Where an instance stands in the ownership negotiation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum Role {
    #[default]
    Unclaimed,
    ClaimPending,
    Owner,
    Follower,
}

impl Role {
    pub fn is_owner(&self) -> bool {
        *self == Role::Owner
    }
}
