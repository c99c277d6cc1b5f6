use slotmap::new_key_type;

new_key_type! {
    /// Identifies a standalone fluid container (mouth, stomach) in a body.
    pub struct ContainerId;

    /// Identifies an aggregate reservoir of producing organs.
    pub struct ReservoirId;

    /// Identifies an expulsion organ (outlet) that may drain a reservoir.
    pub struct OutletId;

    /// Identifies a transport conduit between two containers.
    pub struct ConduitId;

    /// Identifies a body within a session.
    pub struct BodyId;
}
