pub mod api;
pub mod http;

pub use api::{
    AvatarSession, InterviewApi, InterviewContext, InterviewRecord, StreamDescriptor, TurnAck,
    TurnPayload,
};
pub use http::HttpInterviewApi;
