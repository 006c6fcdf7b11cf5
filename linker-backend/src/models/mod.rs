pub mod linker;
pub mod message;
pub mod notification;
pub mod pairing;
pub mod session;

pub use linker::{
    CallResult, CallSubmission, ClientPoll, ClientPollRequest, ClientUnlinkRequest, CodeGrant,
    CodePreview, CodeRequest, EndpointRegistration, LinkGrant, LinkRequest, WalletLinksRequest,
    WalletPollRequest, WalletUnlinkRequest,
};
pub use message::{CallRequest, ClientMessage, ClientMessageBody, WalletMessage, WalletMessageBody};
pub use notification::{NotificationEndpoint, NotificationKind};
pub use pairing::{
    AppInfo, CallMeta, LinkSummary, NewCall, PairingRecord, PairingState, PendingCall, RawAppInfo,
};
pub use session::LinkedSession;
