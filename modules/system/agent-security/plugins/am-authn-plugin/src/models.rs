/// Identity carried by an `AUTH_AM` token.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AmIdentity {
    /// Principal the access manager bound the ticket to.
    #[prost(string, tag = "1")]
    pub principal: String,
    #[prost(string, repeated, tag = "2")]
    pub groups: Vec<String>,
    /// Local uid of the process that presented the ticket.
    #[prost(uint32, tag = "3")]
    pub uid: u32,
    #[prost(uint32, tag = "4")]
    pub gid: u32,
}
