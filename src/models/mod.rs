pub mod page;
pub mod submission;

pub use page::{Page, Pagination};
pub use submission::{
    Field, FieldValue, NewSubmission, RecentSubmission, Source, Submission, SubmissionFields,
    SubmissionFilter, SubmissionPatch, UserTypeCount,
};
