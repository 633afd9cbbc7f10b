//! Collaborator traits (ports)

mod collaborators;

pub use collaborators::{
    ChatDirectory, CredentialVerifier, DomainResult, MessageStore, StatusStore,
};
