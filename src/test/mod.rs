mod distributed;
mod sim_time;
mod topologies;
