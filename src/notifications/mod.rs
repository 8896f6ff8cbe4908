mod email;

pub use email::ReportMailer;
