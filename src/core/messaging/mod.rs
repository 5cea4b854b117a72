mod codec;
mod listener;

pub use codec::{read_frame, write_frame, RawRequest, Request, Response, MAX_MESSAGE_LEN};
pub use listener::{listen, LaunchRequestHandler};
