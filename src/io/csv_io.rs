use std::fs;
use std::path::Path;
use crate::telemetry::{FrameSeries, Recorder};

#[derive(Debug)]
pub enum CsvError {
    OpenFileError,
    ReadError(String),
    WriteError(String),
}

impl From<CsvError> for String {
    fn from(error: CsvError) -> Self {
        match error {
            CsvError::OpenFileError => "Failed to open file".to_string(),
            CsvError::ReadError(msg) => format!("Read error: {}", msg),
            CsvError::WriteError(msg) => format!("Write error: {}", msg),
        }
    }
}

/*
Writes a recorder to a CSV file with a Frame index column followed by one
column per series.
 */
pub fn write_recorder(filename: &str, recorder: &Recorder) -> Result<(), CsvError> {
    // Check that all series in the recorder have the same length
    let data_length = match recorder.series.len() {
        0 => 0,
        _ => recorder.series[0].len(),
    };
    for series in recorder.series.iter() {
        if series.len() != data_length {
            return Err(CsvError::WriteError(
                "Cannot handle series with different lengths.".to_string(),
            ));
        }
    }

    // Start building the file contents, starting with the header row
    let mut data_string = String::new();
    data_string.push_str("Frame");
    for series in recorder.series.iter() {
        data_string.push_str(",");
        data_string.push_str(&series.name);
    }
    data_string.push_str("\r\n");

    // Build the data section
    for i in 0..data_length {
        data_string.push_str(format!("{}", i).as_str());
        for series in recorder.series.iter() {
            let value = series.values[i];
            data_string.push_str(format!(",{value}").as_str());
        }
        data_string.push_str("\r\n");
    }

    // Write it all to file
    let filename_path = Path::new(filename);
    match fs::write(filename_path, data_string) {
        Ok(_) => Ok(()),
        Err(_) => Err(CsvError::WriteError(format!("Error writing file {filename}."))),
    }
}

/*
Reads a recorder back from a CSV file written by write_recorder. The frame
index column is dropped; frames are implied by row order.
 */
pub fn read_recorder(filename: &str) -> Result<Recorder, CsvError> {
    let mut answer = Recorder::new();

    //Create a new csv reader
    let mut reader = match csv::Reader::from_path(filename) {
        Ok(r) => r,
        Err(_) => {
            return Err(CsvError::OpenFileError);
        }
    };

    //Get the headers from the reader
    let mut file_line = 1;
    let n_data_cols;
    match reader.headers() {
        Ok(headers) => {
            let headers_len = headers.len();
            n_data_cols = (headers_len as i32) - 1; //exclude the Frame column
            for i in 1..headers_len {
                let series = FrameSeries::new(headers.get(i).unwrap_or(""));
                answer.series.push(series);
            }
        }
        Err(_) => {
            return Err(CsvError::ReadError(format!(
                "Error reading '{filename}' line {file_line}."
            )));
        }
    };

    //Iterate through the records and parse the data
    for result in reader.records() {
        file_line += 1;

        //Unwrap the record
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                println!("Error reading file '{filename}': {e}");
                return Err(CsvError::ReadError(format!(
                    "Error reading '{filename}' line {file_line}."
                )));
            }
        };

        //Parse each data column into the respective series
        for i in 0..(n_data_cols as usize) {
            let f = match record.get(i + 1).unwrap_or("").parse() {
                Ok(v) => v,
                Err(_) => {
                    let one_based_data_column = i + 1;
                    return Err(CsvError::ReadError(format!(
                        "Error reading '{filename}' line {file_line} data column {one_based_data_column}."
                    )));
                }
            };
            answer.series[i].push(f);
        }
    }

    //Return
    Ok(answer)
}
