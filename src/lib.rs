pub mod distributed;
pub mod net;
pub mod scenario;
pub mod sched;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
