pub mod auth;
pub mod drive;
pub mod lesson;
pub mod student;
pub mod teacher;

pub use auth::{Credentials, CredentialsHistoryEntry, Role, School, SchoolInfo, Version, Whoami};
pub use drive::DriveFile;
pub use lesson::{lessons_with_image, Lesson};
pub use student::Student;
pub use teacher::{Class, ClassStudent, Record, Stats, Teacher};
