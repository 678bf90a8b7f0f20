pub(crate) mod execution;
pub(crate) mod openai_client;
mod response_handler;
mod tool_call_utils;
