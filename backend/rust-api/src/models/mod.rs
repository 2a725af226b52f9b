pub mod answer;
pub mod attempt;
pub mod definition;
pub mod question;

pub use answer::{Answer, AnswerView, GradeAttemptRequest, GradeEntry, SaveAnswerRequest};
pub use attempt::{
    Attempt, AttemptDetail, AttemptState, AttemptSummary, StartAttemptResponse,
    SubmitAttemptRequest, SubmittedAnswer,
};
pub use definition::{AnswerVisibility, AssessmentDefinition, ImportDefinitionRequest};
pub use question::{OptionView, Question, QuestionOption, QuestionType, QuestionView};
