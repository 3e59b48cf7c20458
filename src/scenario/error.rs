use crate::sim::SimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported schema_version {0} (expected {expected})", expected = super::SCHEMA_VERSION)]
    UnsupportedSchema(u32),

    #[error("scenario must have at least one rank")]
    NoRanks,

    #[error("scenario has {0} ranks, at most {max} are supported", max = super::MAX_RANKS)]
    TooManyRanks(u32),

    #[error("node id {0} is declared more than once")]
    DuplicateNode(usize),

    #[error("node ids must be contiguous from 0, missing {0}")]
    MissingNode(usize),

    #[error("reference to unknown node {0}")]
    UnknownNode(usize),

    #[error("node {node} is on rank {rank} but the scenario has {ranks} ranks")]
    RankOutOfRange { node: usize, rank: u32, ranks: u32 },

    #[error("link connects node {0} to itself")]
    SelfLink(usize),

    #[error("link {a} <-> {b} crosses ranks and must have a positive delay")]
    ZeroDelayRemoteLink { a: usize, b: usize },

    #[error("flow {flow}: no route from node {src} to node {dst}")]
    NoRoute { flow: u64, src: usize, dst: usize },

    #[error("flow id {0} is used more than once")]
    DuplicateFlow(u64),

    #[error("{0} does not fit in simulation time")]
    TimeOverflow(String),

    #[error(transparent)]
    Sim(#[from] SimError),
}
