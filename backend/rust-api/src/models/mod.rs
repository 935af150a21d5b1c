pub mod category;
pub mod game;
pub mod question;
pub mod user;

pub use category::{Category, CategoryPatch, CategoryResponse, Language, NewCategory};
pub use question::{NewQuestion, Question, QuestionPatch, QuestionResponse};
