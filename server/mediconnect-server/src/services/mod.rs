pub mod call_flow;
