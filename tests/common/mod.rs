pub(crate) mod fixtures;

pub(crate) mod gated_db;

pub(crate) mod gossip;

pub(crate) mod logging;

pub(crate) mod mem_db;

pub(crate) mod mock_store;
