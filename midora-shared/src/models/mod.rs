pub mod conversation;
pub mod errors;
pub mod message;
pub mod pagination;
pub mod realtime;
pub mod streaming;
pub mod timestamp;
pub mod user;

pub use conversation::{
    Conversation, ConversationCreateRequest, ConversationCreateResponse, ConversationListResponse,
    ConversationUpdateRequest, MessagePageResponse,
};
pub use errors::{ErrorBody, ErrorKind};
pub use message::{Message, MessageRole, SendMessageRequest};
pub use pagination::PageInfo;
pub use realtime::RealtimeFrame;
pub use streaming::{FinalPayload, InitialMetadata, ModelSelection, StreamEvent, StreamMetadata};
pub use timestamp::Timestamp;
pub use user::{
    AuthMethod, AuthTokens, CheckoutRequest, CheckoutResponse, ForgotPasswordRequest, LoginRequest,
    LoginResponse, MeResponse, ProfileUpdateRequest, RefreshRequest, RegenerateOtpRequest,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, SsoExchangeRequest,
    SsoExchangeResponse, SsoProvider, UploadResponse, User, VerifyOtpRequest,
};
