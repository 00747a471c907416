mod mediator;
mod sink;

pub use mediator::{Announcement, AnnouncementMediator, OfferOutcome, SuppressReason};
pub use sink::{LogSpeaker, SpeechError, SpeechSink};
